use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseLimits {
    pub max_employees: u64,
    #[serde(rename = "maxStorageGB")]
    pub max_storage_gb: f64,
    #[serde(rename = "maxAPICallsPerDay")]
    pub max_api_calls_per_day: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUsage {
    pub employees: u64,
    #[serde(rename = "storageGB")]
    pub storage_gb: f64,
    pub api_calls_today: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub method_type: String,
    pub last4: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub amount: f64,
    pub status: String,
    pub invoice_number: String,
}

/// The tenant's subscription. Display only: nothing enforces the limits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: u64,
    pub tenant_id: u64,
    pub plan_name: String,
    pub plan_type: String,
    pub status: String,
    pub total_seats: u64,
    pub used_seats: u64,
    pub available_seats: u64,
    pub price_per_seat: f64,
    pub total_price: f64,
    pub billing_cycle: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub expiry_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub renewal_date: NaiveDate,
    pub auto_renew: bool,
    pub features: Vec<String>,
    pub limits: LicenseLimits,
    pub usage: LicenseUsage,
    pub payment_method: PaymentMethod,
    pub billing_history: Vec<BillingEntry>,
}

impl License {
    /// Recomputes the seat and price fields from the seat counts.
    pub fn refresh_seats(&mut self, used: u64) {
        self.used_seats = used;
        self.usage.employees = used;
        self.available_seats = self.total_seats.saturating_sub(used);
        self.total_price = self.total_seats as f64 * self.price_per_seat;
    }
}

impl Default for License {
    fn default() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        let mut license = Self {
            id: 1,
            tenant_id: 1,
            plan_name: "Professional".to_string(),
            plan_type: "professional".to_string(),
            status: "active".to_string(),
            total_seats: 50,
            used_seats: 0,
            available_seats: 50,
            price_per_seat: 12.0,
            total_price: 0.0,
            billing_cycle: "monthly".to_string(),
            start_date: date(2025, 1, 1),
            expiry_date: date(2026, 12, 31),
            renewal_date: date(2026, 12, 1),
            auto_renew: true,
            features: [
                "Employee Management",
                "Timesheets",
                "Leave Management",
                "Invoicing",
                "Approvals",
                "Email Templates",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            limits: LicenseLimits {
                max_employees: 100,
                max_storage_gb: 50.0,
                max_api_calls_per_day: 10_000,
            },
            usage: LicenseUsage {
                employees: 0,
                storage_gb: 2.4,
                api_calls_today: 0,
            },
            payment_method: PaymentMethod {
                method_type: "card".to_string(),
                last4: "4242".to_string(),
                expiry_month: 12,
                expiry_year: 2027,
            },
            billing_history: vec![BillingEntry {
                id: 1,
                date: date(2025, 12, 1),
                amount: 600.0,
                status: "paid".to_string(),
                invoice_number: "LIC-2025-12".to_string(),
            }],
        };
        license.refresh_seats(0);
        license
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicensePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_monthly: f64,
    pub price_annual: f64,
    pub max_seats: u64,
    pub features: Vec<String>,
    pub limits: LicenseLimits,
}

pub fn plan_catalogue() -> Vec<LicensePlan> {
    let plan = |id: &str,
                name: &str,
                description: &str,
                monthly: f64,
                max_seats: u64,
                features: &[&str],
                limits: (u64, f64, u64)| LicensePlan {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        price_monthly: monthly,
        price_annual: monthly * 10.0,
        max_seats,
        features: features.iter().map(|f| f.to_string()).collect(),
        limits: LicenseLimits {
            max_employees: limits.0,
            max_storage_gb: limits.1,
            max_api_calls_per_day: limits.2,
        },
    };

    vec![
        plan(
            "starter",
            "Starter",
            "Core HR for small teams",
            8.0,
            10,
            &["Employee Management", "Timesheets", "Leave Management"],
            (25, 10.0, 2_000),
        ),
        plan(
            "professional",
            "Professional",
            "Invoicing, approvals and templates",
            12.0,
            100,
            &[
                "Employee Management",
                "Timesheets",
                "Leave Management",
                "Invoicing",
                "Approvals",
                "Email Templates",
            ],
            (100, 50.0, 10_000),
        ),
        plan(
            "enterprise",
            "Enterprise",
            "Everything plus document-list sync",
            20.0,
            1_000,
            &[
                "Employee Management",
                "Timesheets",
                "Leave Management",
                "Invoicing",
                "Approvals",
                "Email Templates",
                "Document-list Sync",
                "Audit Logs",
            ],
            (1_000, 500.0, 100_000),
        ),
    ]
}
