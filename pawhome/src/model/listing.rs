use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Species of a listed pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    Bird,
    Other,
}

impl Species {
    /// Human-readable label, also matched by free-text search.
    pub const fn label(self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
            Species::Rabbit => "rabbit",
            Species::Bird => "bird",
            Species::Other => "other",
        }
    }
}

/// Rough size class of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Availability state of a listing.
///
/// Legal flow: `Available → Reserved → Adopted`, with a reservation released
/// back to `Available` when the reserving request is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Reserved,
    Adopted,
}

impl ListingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Reserved => "reserved",
            ListingStatus::Adopted => "adopted",
        }
    }
}

/// Where a listed pet currently lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Location {
    pub fn new(city: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            region: region.into(),
            lat: None,
            lon: None,
        }
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }
}

/// A single image attached to a listing. At most one image per listing is
/// flagged primary; [`Listing::set_primary_image`] maintains the invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingImage {
    pub url: String,
    pub primary: bool,
}

/// A pet available for adoption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub size: SizeClass,
    pub age_months: u32,
    pub sex: Sex,
    pub sterilized: bool,
    pub vaccinated: bool,
    pub dewormed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_needs: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
    pub urgent: bool,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
    pub view_count: u64,
    pub inquiry_count: u64,
    pub favorite_count: u64,
    pub images: Vec<ListingImage>,
}

impl Listing {
    /// Create a new `Available` listing with zeroed counters.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        species: Species,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            species,
            breed: String::new(),
            size: SizeClass::Medium,
            age_months: 0,
            sex: Sex::Female,
            sterilized: false,
            vaccinated: false,
            dewormed: false,
            special_needs: None,
            description: String::new(),
            tags: Vec::new(),
            location: Location::new("", ""),
            urgent: false,
            status: ListingStatus::Available,
            created_at,
            owner_id: owner_id.into(),
            view_count: 0,
            inquiry_count: 0,
            favorite_count: 0,
            images: Vec::new(),
        }
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = breed.into();
        self
    }

    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }

    pub fn with_age_months(mut self, age_months: u32) -> Self {
        self.age_months = age_months;
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = sex;
        self
    }

    pub fn with_health_flags(mut self, sterilized: bool, vaccinated: bool, dewormed: bool) -> Self {
        self.sterilized = sterilized;
        self.vaccinated = vaccinated;
        self.dewormed = dewormed;
        self
    }

    pub fn with_special_needs(mut self, note: impl Into<String>) -> Self {
        self.special_needs = Some(note.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    /// Record one detail-page view. Counters are monotone non-decreasing.
    pub fn record_view(&mut self) {
        self.view_count = self.view_count.saturating_add(1);
    }

    /// Record one adoption inquiry.
    pub fn record_inquiry(&mut self) {
        self.inquiry_count = self.inquiry_count.saturating_add(1);
    }

    pub fn record_favorite(&mut self) {
        self.favorite_count = self.favorite_count.saturating_add(1);
    }

    /// Append an image. The first image attached becomes primary.
    pub fn add_image(&mut self, url: impl Into<String>) {
        let primary = self.images.iter().all(|img| !img.primary);
        self.images.push(ListingImage {
            url: url.into(),
            primary,
        });
    }

    /// Flag the image at `index` as primary, clearing any previous flag.
    /// Out-of-range indices leave the listing unchanged.
    pub fn set_primary_image(&mut self, index: usize) {
        if index >= self.images.len() {
            return;
        }
        for (i, image) in self.images.iter_mut().enumerate() {
            image.primary = i == index;
        }
    }

    pub fn primary_image(&self) -> Option<&ListingImage> {
        self.images.iter().find(|img| img.primary)
    }
}
