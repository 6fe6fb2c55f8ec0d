use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Builder,
    Admin,
}

impl Role {
    /// Agents, builders and admins may publish listings.
    pub fn can_list(&self) -> bool {
        !matches!(self, Role::User)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Builder => "builder",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    Plot,
    Commercial,
    Office,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

// Stored user record; never serialized directly
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub price: u64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub status: PropertyStatus,
    pub address: String,
    pub city: String,
    pub state: String,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    pub area_sqft: u32,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub featured: bool,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub property_id: Uuid,
    pub owner_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

/// One page of results plus totals for pagination controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `items` (already filtered and sorted) down to one page.
    pub fn paginate(items: Vec<T>, page: usize, limit: usize) -> Self {
        let total = items.len();
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub users: usize,
    pub agents: usize,
    pub builders: usize,
    pub properties: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub sold: usize,
    pub inquiries: usize,
    pub subscribers: usize,
    pub faqs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_and_counts() {
        let page = Page::paginate((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let past_end = Page::paginate(vec![1, 2], 5, 10);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_pages, 1);
    }

    #[test]
    fn huge_page_number_is_an_empty_page() {
        let page = Page::paginate((1..=5).collect::<Vec<_>>(), usize::MAX, 50);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.page, usize::MAX);
    }

    #[test]
    fn only_plain_users_cannot_list() {
        assert!(!Role::User.can_list());
        assert!(Role::Agent.can_list());
        assert!(Role::Builder.can_list());
        assert!(Role::Admin.can_list());
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&PropertyType::Villa).unwrap(), "\"villa\"");
        assert_eq!(serde_json::to_string(&SortOrder::PriceDesc).unwrap(), "\"price_desc\"");
        let role: Role = serde_json::from_str("\"builder\"").unwrap();
        assert_eq!(role, Role::Builder);
    }
}
