use exam_core::model::UserId;

/// The signed-in test-taker. Resolving the user is the authentication layer's job.
pub trait CurrentUser: Send + Sync {
    fn id(&self) -> UserId;
}

impl CurrentUser for UserId {
    fn id(&self) -> UserId {
        self.clone()
    }
}
