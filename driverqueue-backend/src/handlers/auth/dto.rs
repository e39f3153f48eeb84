#[derive(serde::Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}
