use validator::Validate;

use crate::api::error;

/// Identity used to open the realtime connection and authorize channels.
#[derive(Debug, Clone, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), access_token: access_token.into() }
    }

    /// Both values must be present, otherwise realtime stays off.
    pub fn from_parts(user_id: Option<String>, access_token: Option<String>) -> Option<Self> {
        Some(Self::new(user_id?, access_token?))
    }
}

/// Run `validator` rules on an input model before it leaves the process.
pub fn validated<T: Validate>(model: T) -> Result<T, error::Error> {
    model.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
    Ok(model)
}
