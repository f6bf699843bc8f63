use crate::models::{Order, User};
use crate::requests::{SearchRequest, StoreUserRequest};

pub struct UserController;

impl UserController {
    /// List users.
    pub fn index(&self, query: Query<SearchRequest>) -> Json<Vec<User>> {
        todo!()
    }

    /// Create a user.
    ///
    /// Sends a welcome mail once the user is stored.
    pub fn store(&self, request: Json<StoreUserRequest>) -> Json<User> {
        todo!()
    }

    /// Show a user.
    pub fn show(&self, Path(user): Path<u64>) -> Json<User> {
        todo!()
    }

    /// Export all users as CSV.
    ///
    /// @deprecated use the reports endpoint
    pub fn export(&self) -> String {
        todo!()
    }
}

pub struct OrderController;

impl OrderController {
    pub fn index(&self) -> Json<Vec<Order>> {
        todo!()
    }

    pub fn store(&self, order: Json<Order>) -> Json<Order> {
        todo!()
    }
}

pub struct WebhookController;

impl WebhookController {
    /// An order was paid.
    pub fn order_paid(&self, payload: Json<Order>) {}
}

pub struct DocsController;

impl DocsController {
    pub fn ui(&self) -> String {
        todo!()
    }
}
