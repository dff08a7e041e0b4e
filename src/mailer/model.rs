use serde::Deserialize;

/// Accepted-send response from the mail provider.
#[derive(Deserialize, Debug)]
pub struct SendResp {
    pub id: String,
}
