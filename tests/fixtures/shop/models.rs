use serde::Serialize;

/// A customer account.
#[derive(Serialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub nickname: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub total_cents: u64,
    pub status: OrderStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}
