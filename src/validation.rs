//! Request payload schemas and their rules.
//!
//! Every payload goes through [`accept`]: it is sanitized first, then every
//! rule is checked and all violations are reported together.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt::Display;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldError};
use crate::models::{ListingType, PropertyStatus, PropertyType, Role, SortOrder};
use crate::sanitize::{
    clean_rich_text, normalize_email, normalize_phone, sanitize_search, strip_html,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{10,15}$").unwrap();
}

pub const MAX_PAGE_SIZE: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 12;
const MAX_AMENITIES: usize = 50;
const MAX_IMAGES: usize = 20;

pub trait Validate: Sized {
    fn errors(&self) -> Vec<FieldError>;

    fn sanitized(self) -> Self {
        self
    }
}

/// Sanitize then validate a payload.
pub fn accept<T: Validate>(input: T) -> AppResult<T> {
    let input = input.sanitized();
    let errors = input.errors();
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(AppError::Validation(errors))
    }
}

#[derive(Default)]
struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, format!("must be at least {min} characters"));
        } else if len > max {
            self.fail(field, format!("must be at most {max} characters"));
        }
    }

    fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.fail(field, "is required");
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        if value.len() > 254 || !EMAIL_RE.is_match(value) {
            self.fail(field, "must be a valid email address");
        }
    }

    fn phone(&mut self, field: &str, value: &str) {
        if !PHONE_RE.is_match(value) {
            self.fail(field, "must be a valid phone number");
        }
    }

    fn password(&mut self, field: &str, value: &str) {
        self.length(field, value, 8, 128);
        if !value.chars().any(|c| c.is_ascii_uppercase()) {
            self.fail(field, "must contain an uppercase letter");
        }
        if !value.chars().any(|c| c.is_ascii_lowercase()) {
            self.fail(field, "must contain a lowercase letter");
        }
        if !value.chars().any(|c| c.is_ascii_digit()) {
            self.fail(field, "must contain a digit");
        }
    }

    fn range<T: PartialOrd + Display>(&mut self, field: &str, value: T, min: T, max: T) {
        if value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        }
    }

    fn urls(&mut self, field: &str, values: &[String]) {
        if values
            .iter()
            .any(|u| !(u.starts_with("https://") || u.starts_with("http://")) || u.len() > 2048)
        {
            self.fail(field, "must contain only http(s) URLs");
        }
    }

    fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .iter()
        .map(|v| strip_html(v))
        .filter(|v| !v.is_empty())
        .collect()
}

fn clean_opt_phone(phone: Option<String>) -> Option<String> {
    phone.map(|p| normalize_phone(&p)).filter(|p| !p.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Validate for RegisterInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.length("name", &self.name, 2, 100);
        c.email("email", &self.email);
        c.password("password", &self.password);
        if let Some(phone) = &self.phone {
            c.phone("phone", phone);
        }
        if self.role == Some(Role::Admin) {
            c.fail("role", "must be one of user, agent, builder");
        }
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            name: strip_html(&self.name),
            email: normalize_email(&self.email),
            phone: clean_opt_phone(self.phone),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl Validate for LoginInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.email("email", &self.email);
        c.required("password", &self.password);
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeInput {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for PasswordChangeInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.required("current_password", &self.current_password);
        c.password("new_password", &self.new_password);
        if self.current_password == self.new_password {
            c.fail("new_password", "must differ from the current password");
        }
        c.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAccountInput {
    pub password: String,
}

impl Validate for DeleteAccountInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.required("password", &self.password);
        c.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyInput {
    pub title: String,
    pub description: String,
    pub price: u64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub bathrooms: Option<u8>,
    pub area_sqft: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Validate for PropertyInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.length("title", &self.title, 5, 200);
        c.length("description", &self.description, 20, 5000);
        if self.price == 0 {
            c.fail("price", "must be greater than 0");
        }
        c.required("address", &self.address);
        c.length("city", &self.city, 2, 100);
        c.length("state", &self.state, 2, 100);
        if let Some(bedrooms) = self.bedrooms {
            c.range("bedrooms", bedrooms, 0, 50);
        }
        if let Some(bathrooms) = self.bathrooms {
            c.range("bathrooms", bathrooms, 0, 50);
        }
        if self.area_sqft == 0 {
            c.fail("area_sqft", "must be greater than 0");
        }
        if self.amenities.len() > MAX_AMENITIES {
            c.fail("amenities", format!("must have at most {MAX_AMENITIES} entries"));
        }
        if self.images.len() > MAX_IMAGES {
            c.fail("images", format!("must have at most {MAX_IMAGES} entries"));
        }
        c.urls("images", &self.images);
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            title: strip_html(&self.title),
            description: clean_rich_text(&self.description),
            address: strip_html(&self.address),
            city: strip_html(&self.city),
            state: strip_html(&self.state),
            amenities: clean_list(self.amenities),
            images: self.images.into_iter().map(|u| u.trim().to_string()).collect(),
            ..self
        }
    }
}

/// Partial listing update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,
    pub area_sqft: Option<u32>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

impl Validate for PropertyUpdate {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        if let Some(title) = &self.title {
            c.length("title", title, 5, 200);
        }
        if let Some(description) = &self.description {
            c.length("description", description, 20, 5000);
        }
        if self.price == Some(0) {
            c.fail("price", "must be greater than 0");
        }
        if let Some(address) = &self.address {
            c.required("address", address);
        }
        if let Some(city) = &self.city {
            c.length("city", city, 2, 100);
        }
        if let Some(state) = &self.state {
            c.length("state", state, 2, 100);
        }
        if let Some(bedrooms) = self.bedrooms {
            c.range("bedrooms", bedrooms, 0, 50);
        }
        if let Some(bathrooms) = self.bathrooms {
            c.range("bathrooms", bathrooms, 0, 50);
        }
        if self.area_sqft == Some(0) {
            c.fail("area_sqft", "must be greater than 0");
        }
        if let Some(amenities) = &self.amenities
            && amenities.len() > MAX_AMENITIES
        {
            c.fail("amenities", format!("must have at most {MAX_AMENITIES} entries"));
        }
        if let Some(images) = &self.images {
            if images.len() > MAX_IMAGES {
                c.fail("images", format!("must have at most {MAX_IMAGES} entries"));
            }
            c.urls("images", images);
        }
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            title: self.title.as_deref().map(strip_html),
            description: self.description.as_deref().map(clean_rich_text),
            address: self.address.as_deref().map(strip_html),
            city: self.city.as_deref().map(strip_html),
            state: self.state.as_deref().map(strip_html),
            amenities: self.amenities.map(clean_list),
            images: self
                .images
                .map(|images| images.into_iter().map(|u| u.trim().to_string()).collect()),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InquiryInput {
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

impl Validate for InquiryInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.length("name", &self.name, 2, 100);
        c.email("email", &self.email);
        if let Some(phone) = &self.phone {
            c.phone("phone", phone);
        }
        c.length("message", &self.message, 10, 2000);
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            name: strip_html(&self.name),
            email: normalize_email(&self.email),
            phone: clean_opt_phone(self.phone),
            message: strip_html(&self.message),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsletterInput {
    pub email: String,
}

impl Validate for NewsletterInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.email("email", &self.email);
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

impl Validate for FaqInput {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        c.length("question", &self.question, 5, 500);
        c.length("answer", &self.answer, 5, 5000);
        if let Some(category) = &self.category {
            c.length("category", category, 1, 50);
        }
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            question: strip_html(&self.question),
            answer: clean_rich_text(&self.answer),
            category: self
                .category
                .as_deref()
                .map(strip_html)
                .filter(|c| !c.is_empty()),
            ..self
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl Validate for StatusUpdate {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        if self.status.is_none() && self.featured.is_none() {
            c.fail("status", "status or featured is required");
        }
        c.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

impl Validate for RoleUpdate {
    fn errors(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Public listing search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingQuery {
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub bedrooms: Option<u8>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListingQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Stable textual form used as the listing cache key.
    pub fn cache_key_source(&self) -> String {
        format!(
            "city={:?}|type={:?}|listing={:?}|min={:?}|max={:?}|bed={:?}|q={:?}|sort={:?}|page={}|limit={}",
            self.city.as_deref().map(str::to_lowercase),
            self.property_type,
            self.listing_type,
            self.min_price,
            self.max_price,
            self.bedrooms,
            self.q.as_deref().map(str::to_lowercase),
            self.sort,
            self.page(),
            self.limit()
        )
    }
}

impl Validate for ListingQuery {
    fn errors(&self) -> Vec<FieldError> {
        let mut c = Checks::default();
        if self.page == Some(0) {
            c.fail("page", "must be at least 1");
        }
        if let Some(limit) = self.limit {
            c.range("limit", limit, 1, MAX_PAGE_SIZE);
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            c.fail("min_price", "must not exceed max_price");
        }
        c.finish()
    }

    fn sanitized(self) -> Self {
        Self {
            city: self
                .city
                .as_deref()
                .map(strip_html)
                .filter(|c| !c.is_empty()),
            q: self
                .q
                .as_deref()
                .map(sanitize_search)
                .filter(|q| !q.is_empty()),
            ..self
        }
    }
}
