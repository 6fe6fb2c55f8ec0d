//! In-process keyed storage for every marketplace entity.
//!
//! Each collection is a `DashMap`. Guards are never held across a call that
//! touches the same map, so no method can deadlock on a shard lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::cmp::Reverse;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    AdminStats, Faq, Inquiry, Page, Property, PropertyStatus, Role, Session, SortOrder,
    Subscriber, User,
};
use crate::sanitize::slugify;
use crate::validation::{FaqInput, ListingQuery, PropertyInput, PropertyUpdate};

// Fields needed to create a user
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Default)]
pub struct Store {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    sessions: DashMap<String, Session>, // token hash -> session
    properties: DashMap<Uuid, Property>,
    slugs: DashMap<String, Uuid>,
    inquiries: DashMap<Uuid, Inquiry>,
    favorites: DashMap<Uuid, HashSet<Uuid>>, // user -> property ids
    faqs: DashMap<Uuid, Faq>,
    subscribers: DashMap<String, Subscriber>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- users ----

    pub fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let id = Uuid::new_v4();
        match self.emails.entry(new.email.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let user = User {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            role: new.role,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.emails.get(email)?;
        self.user(id)
    }

    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| Reverse(u.created_at));
        users
    }

    pub fn set_role(&self, id: Uuid, role: Role) -> AppResult<User> {
        let mut user = self.users.get_mut(&id).ok_or(AppError::NotFound("user"))?;
        user.role = role;
        Ok(user.clone())
    }

    pub fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let mut user = self.users.get_mut(&id).ok_or(AppError::NotFound("user"))?;
        user.password_hash = password_hash;
        Ok(())
    }

    /// Remove a user with their sessions, listings and favorites.
    pub fn delete_user(&self, id: Uuid) -> AppResult<User> {
        let (_, user) = self.users.remove(&id).ok_or(AppError::NotFound("user"))?;
        self.emails.remove(&user.email);
        self.delete_sessions_for(id);
        self.favorites.remove(&id);

        let owned: Vec<Uuid> = self
            .properties
            .iter()
            .filter(|p| p.owner_id == id)
            .map(|p| p.id)
            .collect();
        for property_id in owned {
            self.delete_property(property_id).ok();
        }
        Ok(user)
    }

    // ---- sessions ----

    pub fn insert_session(&self, token_hash: String, session: Session) {
        self.sessions.insert(token_hash, session);
    }

    /// Resolve a live session to its user. Expired sessions are removed.
    pub fn session_user(&self, token_hash: &str, now: DateTime<Utc>) -> Option<User> {
        let session = self.sessions.get(token_hash).map(|s| s.clone())?;
        if session.expires_at <= now {
            self.sessions.remove(token_hash);
            return None;
        }
        self.user(session.user_id)
    }

    pub fn delete_session(&self, token_hash: &str) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    pub fn delete_sessions_for(&self, user_id: Uuid) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user_id != user_id);
        before.saturating_sub(self.sessions.len())
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    // ---- properties ----

    pub fn insert_property(
        &self,
        owner_id: Uuid,
        input: PropertyInput,
        status: PropertyStatus,
    ) -> Property {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let slug = self.claim_slug(&format!("{} {}", input.title, input.city), id);

        let property = Property {
            id,
            owner_id,
            slug,
            title: input.title,
            description: input.description,
            price: input.price,
            property_type: input.property_type,
            listing_type: input.listing_type,
            status,
            address: input.address,
            city: input.city,
            state: input.state,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            area_sqft: input.area_sqft,
            amenities: input.amenities,
            images: input.images,
            featured: false,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.properties.insert(id, property.clone());
        property
    }

    // First free slug among base, base-2, base-3, ...
    fn claim_slug(&self, source: &str, id: Uuid) -> String {
        let base = match slugify(source) {
            s if s.is_empty() => "listing".to_string(),
            s => s,
        };

        let mut n = 1;
        loop {
            let candidate = if n == 1 {
                base.clone()
            } else {
                format!("{base}-{n}")
            };
            if let Entry::Vacant(slot) = self.slugs.entry(candidate.clone()) {
                slot.insert(id);
                return candidate;
            }
            n += 1;
        }
    }

    pub fn property(&self, id: Uuid) -> Option<Property> {
        self.properties.get(&id).map(|p| p.clone())
    }

    pub fn property_by_slug(&self, slug: &str) -> Option<Property> {
        let id = *self.slugs.get(slug)?;
        self.property(id)
    }

    /// Apply a partial update. With `resubmit`, an approved listing goes
    /// back to moderation.
    pub fn update_property(
        &self,
        id: Uuid,
        update: PropertyUpdate,
        resubmit: bool,
    ) -> AppResult<Property> {
        let mut property = self
            .properties
            .get_mut(&id)
            .ok_or(AppError::NotFound("property"))?;

        if let Some(title) = update.title {
            property.title = title;
        }
        if let Some(description) = update.description {
            property.description = description;
        }
        if let Some(price) = update.price {
            property.price = price;
        }
        if let Some(property_type) = update.property_type {
            property.property_type = property_type;
        }
        if let Some(listing_type) = update.listing_type {
            property.listing_type = listing_type;
        }
        if let Some(address) = update.address {
            property.address = address;
        }
        if let Some(city) = update.city {
            property.city = city;
        }
        if let Some(state) = update.state {
            property.state = state;
        }
        if update.bedrooms.is_some() {
            property.bedrooms = update.bedrooms;
        }
        if update.bathrooms.is_some() {
            property.bathrooms = update.bathrooms;
        }
        if let Some(area_sqft) = update.area_sqft {
            property.area_sqft = area_sqft;
        }
        if let Some(amenities) = update.amenities {
            property.amenities = amenities;
        }
        if let Some(images) = update.images {
            property.images = images;
        }
        if resubmit && property.status == PropertyStatus::Approved {
            property.status = PropertyStatus::Pending;
        }
        property.updated_at = Utc::now();
        Ok(property.clone())
    }

    pub fn set_property_status(
        &self,
        id: Uuid,
        status: Option<PropertyStatus>,
        featured: Option<bool>,
    ) -> AppResult<Property> {
        let mut property = self
            .properties
            .get_mut(&id)
            .ok_or(AppError::NotFound("property"))?;
        if let Some(status) = status {
            property.status = status;
        }
        if let Some(featured) = featured {
            property.featured = featured;
        }
        property.updated_at = Utc::now();
        Ok(property.clone())
    }

    /// Delete a listing and everything that points at it.
    pub fn delete_property(&self, id: Uuid) -> AppResult<Property> {
        let (_, property) = self
            .properties
            .remove(&id)
            .ok_or(AppError::NotFound("property"))?;
        self.slugs.remove(&property.slug);
        for mut favorites in self.favorites.iter_mut() {
            favorites.remove(&id);
        }
        self.inquiries.retain(|_, i| i.property_id != id);
        Ok(property)
    }

    pub fn record_view(&self, id: Uuid) {
        if let Some(mut property) = self.properties.get_mut(&id) {
            property.views += 1;
        }
    }

    /// Approved listings matching `query`, sorted and paginated.
    pub fn search(&self, query: &ListingQuery) -> Page<Property> {
        let city = query.city.as_deref().map(str::to_lowercase);
        let terms: Vec<String> = query
            .q
            .as_deref()
            .map(|q| q.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let mut matches: Vec<Property> = self
            .properties
            .iter()
            .filter(|p| p.status == PropertyStatus::Approved)
            .filter(|p| city.as_ref().is_none_or(|c| p.city.to_lowercase() == *c))
            .filter(|p| query.property_type.is_none_or(|t| p.property_type == t))
            .filter(|p| query.listing_type.is_none_or(|t| p.listing_type == t))
            .filter(|p| query.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| query.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| {
                query
                    .bedrooms
                    .is_none_or(|min| p.bedrooms.is_some_and(|b| b >= min))
            })
            .filter(|p| {
                if terms.is_empty() {
                    return true;
                }
                let haystack =
                    format!("{} {} {}", p.title, p.description, p.city).to_lowercase();
                terms.iter().all(|t| haystack.contains(t.as_str()))
            })
            .map(|p| p.clone())
            .collect();

        sort_properties(&mut matches, query.sort);
        Page::paginate(matches, query.page(), query.limit())
    }

    pub fn properties_by_owner(&self, owner_id: Uuid) -> Vec<Property> {
        let mut owned: Vec<Property> = self
            .properties
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .map(|p| p.clone())
            .collect();
        sort_properties(&mut owned, SortOrder::Newest);
        owned
    }

    pub fn properties_by_status(&self, status: Option<PropertyStatus>) -> Vec<Property> {
        let mut listed: Vec<Property> = self
            .properties
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .map(|p| p.clone())
            .collect();
        sort_properties(&mut listed, SortOrder::Newest);
        listed
    }

    // ---- favorites ----

    /// Returns false when the favorite already existed.
    pub fn add_favorite(&self, user_id: Uuid, property_id: Uuid) -> bool {
        self.favorites
            .entry(user_id)
            .or_default()
            .insert(property_id)
    }

    pub fn remove_favorite(&self, user_id: Uuid, property_id: Uuid) -> bool {
        self.favorites
            .get_mut(&user_id)
            .is_some_and(|mut set| set.remove(&property_id))
    }

    pub fn favorites(&self, user_id: Uuid) -> Vec<Property> {
        let ids: Vec<Uuid> = self
            .favorites
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        let mut properties: Vec<Property> =
            ids.into_iter().filter_map(|id| self.property(id)).collect();
        sort_properties(&mut properties, SortOrder::Newest);
        properties
    }

    // ---- inquiries ----

    pub fn insert_inquiry(&self, inquiry: Inquiry) -> Inquiry {
        self.inquiries.insert(inquiry.id, inquiry.clone());
        inquiry
    }

    pub fn inquiries_received(&self, owner_id: Uuid) -> Vec<Inquiry> {
        self.inquiries_where(|i| i.owner_id == owner_id)
    }

    pub fn inquiries_sent(&self, sender_id: Uuid) -> Vec<Inquiry> {
        self.inquiries_where(|i| i.sender_id == Some(sender_id))
    }

    fn inquiries_where(&self, keep: impl Fn(&Inquiry) -> bool) -> Vec<Inquiry> {
        let mut found: Vec<Inquiry> = self
            .inquiries
            .iter()
            .filter(|i| keep(i.value()))
            .map(|i| i.clone())
            .collect();
        found.sort_by_key(|i| Reverse(i.created_at));
        found
    }

    // ---- faqs ----

    pub fn faqs(&self) -> Vec<Faq> {
        let mut faqs: Vec<Faq> = self.faqs.iter().map(|f| f.clone()).collect();
        faqs.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
        });
        faqs
    }

    pub fn insert_faq(&self, input: FaqInput) -> Faq {
        let position = input
            .position
            .unwrap_or_else(|| self.faqs.iter().map(|f| f.position + 1).max().unwrap_or(0));
        let faq = Faq {
            id: Uuid::new_v4(),
            question: input.question,
            answer: input.answer,
            category: input.category,
            position,
            created_at: Utc::now(),
        };
        self.faqs.insert(faq.id, faq.clone());
        faq
    }

    pub fn update_faq(&self, id: Uuid, input: FaqInput) -> AppResult<Faq> {
        let mut faq = self.faqs.get_mut(&id).ok_or(AppError::NotFound("faq"))?;
        faq.question = input.question;
        faq.answer = input.answer;
        faq.category = input.category;
        if let Some(position) = input.position {
            faq.position = position;
        }
        Ok(faq.clone())
    }

    pub fn delete_faq(&self, id: Uuid) -> AppResult<()> {
        self.faqs
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound("faq"))
    }

    // ---- newsletter ----

    /// Returns false when the address was already subscribed.
    pub fn subscribe(&self, email: String) -> bool {
        match self.subscribers.entry(email.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Subscriber {
                    email,
                    subscribed_at: Utc::now(),
                });
                true
            }
        }
    }

    pub fn unsubscribe(&self, email: &str) -> bool {
        self.subscribers.remove(email).is_some()
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        let mut subscribers: Vec<Subscriber> =
            self.subscribers.iter().map(|s| s.clone()).collect();
        subscribers.sort_by_key(|s| Reverse(s.subscribed_at));
        subscribers
    }

    // ---- admin ----

    pub fn stats(&self) -> AdminStats {
        let mut stats = AdminStats {
            users: self.users.len(),
            properties: self.properties.len(),
            inquiries: self.inquiries.len(),
            subscribers: self.subscribers.len(),
            faqs: self.faqs.len(),
            ..Default::default()
        };
        for user in self.users.iter() {
            match user.role {
                Role::Agent => stats.agents += 1,
                Role::Builder => stats.builders += 1,
                Role::User | Role::Admin => {}
            }
        }
        for property in self.properties.iter() {
            match property.status {
                PropertyStatus::Pending => stats.pending += 1,
                PropertyStatus::Approved => stats.approved += 1,
                PropertyStatus::Rejected => stats.rejected += 1,
                PropertyStatus::Sold => stats.sold += 1,
            }
        }
        stats
    }
}

fn sort_properties(properties: &mut [Property], order: SortOrder) {
    match order {
        SortOrder::Newest => properties.sort_by_key(|p| Reverse(p.created_at)),
        SortOrder::PriceAsc => properties.sort_by_key(|p| (p.price, Reverse(p.created_at))),
        SortOrder::PriceDesc => properties.sort_by_key(|p| (Reverse(p.price), Reverse(p.created_at))),
    }
}
