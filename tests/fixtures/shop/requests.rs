pub struct StoreUserRequest;

impl StoreUserRequest {
    pub fn rules(&self) -> Rules {
        Rules::from([
            /// Login address, unique per tenant.
            ("email", "required|email"),
            ("name", "required|string|max:255"),
            ("role", "in:admin,member"),
        ])
    }
}

pub struct SearchRequest;

impl SearchRequest {
    pub fn rules(&self) -> Rules {
        Rules::from([
            /// Matched against name and email.
            ("q", "string"),
            ("page", "integer|min:1"),
        ])
    }
}
