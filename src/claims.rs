//! Claims listing shown from the admin area. The rows are fixed sample data.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Approved,
    Pending,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Approved => "approved",
            ClaimStatus::Pending => "pending",
            ClaimStatus::Rejected => "rejected",
        }
    }

    /// Capitalized form used in headings.
    pub fn label(&self) -> &'static str {
        match self {
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(ClaimStatus::Approved),
            "pending" => Ok(ClaimStatus::Pending),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(format!("Unknown claim status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    pub id: u32,
    pub name: &'static str,
    pub policy_number: &'static str,
    pub documents: Vec<&'static str>,
    pub summary: &'static str,
    /// Premium in whole rupees.
    pub premium: u64,
}

pub fn sample_claims() -> Vec<ClaimRecord> {
    vec![
        ClaimRecord {
            id: 1,
            name: "John Doe",
            policy_number: "POL-2024-001",
            documents: vec!["Medical Report", "Bills", "ID Proof"],
            summary: "Cardiac treatment at Apollo Hospital",
            premium: 25_000,
        },
        ClaimRecord {
            id: 2,
            name: "Jane Smith",
            policy_number: "POL-2024-002",
            documents: vec!["Accident Report", "Hospital Bills"],
            summary: "Emergency surgery after road accident",
            premium: 35_000,
        },
        ClaimRecord {
            id: 3,
            name: "Robert Johnson",
            policy_number: "POL-2024-003",
            documents: vec!["Medical History", "Test Reports"],
            summary: "Cancer treatment and therapy",
            premium: 50_000,
        },
        ClaimRecord {
            id: 4,
            name: "Emily Brown",
            policy_number: "POL-2024-004",
            documents: vec!["Hospital Bills", "Prescription"],
            summary: "Respiratory infection treatment",
            premium: 15_000,
        },
        ClaimRecord {
            id: 5,
            name: "Michael Wilson",
            policy_number: "POL-2024-005",
            documents: vec!["Surgery Report", "Recovery Plan"],
            summary: "Knee replacement surgery",
            premium: 45_000,
        },
    ]
}

/// `25000` → `₹25,000`.
pub fn format_premium(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("₹{grouped}")
}

#[derive(Debug, Clone)]
pub struct ClaimsView {
    pub status: ClaimStatus,
    pub claims: Vec<ClaimRecord>,
}

impl ClaimsView {
    pub fn for_status(status: ClaimStatus) -> Self {
        Self { status, claims: sample_claims() }
    }

    pub fn title(&self) -> String {
        format!("{} Claims", self.status.label())
    }

    /// Plain-text table for terminal output.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.title());
        out.push_str("No. | Name | Policy Number | Documents | User Summary | Premium Cost\n");
        for c in &self.claims {
            out.push_str(&format!(
                "{} | {} | {} | {} | {} | {}\n",
                c.id,
                c.name,
                c.policy_number,
                c.documents.join(", "),
                c.summary,
                format_premium(c.premium),
            ));
        }
        out
    }
}
