use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct FollowersResponse {
    pub followers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    pub following: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowStatusResponse {
    pub is_following: bool,
}
