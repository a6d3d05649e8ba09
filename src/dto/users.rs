use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::{Address, User},
    response::PageMeta,
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Substring match on email.
    pub email: Option<String>,
    /// `USER` or `ADMIN`; anything else is ignored.
    pub role: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub addresses: Option<Vec<AddressInput>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct UserCounts {
    pub orders: u64,
    pub addresses: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserListItem {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "_count")]
    pub count: UserCounts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub users: Vec<UserListItem>,
    pub pagination: PageMeta,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithAddresses {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
}
