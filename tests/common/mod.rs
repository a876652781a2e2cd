//! Shared test utilities for the integration suites.
//!
//! Provides the `Property` entity and a repository with the listing
//! branches registered. Import via `#[path = "../common/mod.rs"] mod common;`.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use keybranch::{
    Attribute, AttributeEnum, Branch, EncodingKind, Entity, FieldValue, KeyValueBackend,
    Repository, RepositoryConfig, Result, StoredTime,
};

// ============================================================================
// Logging
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// Property entity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Istanbul,
    Berlin,
    London,
}

impl AttributeEnum for Location {
    fn ordinal(&self) -> i64 {
        *self as i64
    }

    fn label(&self) -> &'static str {
        match self {
            Location::Istanbul => "Istanbul",
            Location::Berlin => "Berlin",
            Location::London => "London",
        }
    }

    fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(Location::Istanbul),
            1 => Some(Location::Berlin),
            2 => Some(Location::London),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub location: Location,
    pub price: i64,
    pub room_number: i64,
    pub is_active: bool,
    pub is_approved: bool,
    pub last_update: Option<StoredTime>,
    /// Not persisted
    pub viewed: bool,
}

static PROPERTY_ATTRIBUTES: [Attribute<Property>; 9] = [
    Attribute::identifier(),
    Attribute::new(
        "Title",
        EncodingKind::String,
        |p| Ok(FieldValue::String(p.title.clone())),
        |p, v| {
            p.title = v.into_string("Title")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Location",
        EncodingKind::Enum,
        |p| Ok(FieldValue::from_enum(&p.location)),
        |p, v| {
            p.location = v.into_enum("Location")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Price",
        EncodingKind::Int,
        |p| Ok(FieldValue::Int(p.price)),
        |p, v| {
            p.price = v.into_i64("Price")?;
            Ok(())
        },
    ),
    Attribute::new(
        "RoomNumber",
        EncodingKind::Int,
        |p| Ok(FieldValue::Int(p.room_number)),
        |p, v| {
            p.room_number = v.into_i64("RoomNumber")?;
            Ok(())
        },
    ),
    Attribute::new(
        "IsActive",
        EncodingKind::Bool,
        |p| Ok(FieldValue::Bool(p.is_active)),
        |p, v| {
            p.is_active = v.into_bool("IsActive")?;
            Ok(())
        },
    ),
    Attribute::new(
        "IsApproved",
        EncodingKind::Bool,
        |p| Ok(FieldValue::Bool(p.is_approved)),
        |p, v| {
            p.is_approved = v.into_bool("IsApproved")?;
            Ok(())
        },
    ),
    Attribute::new(
        "LastUpdateDateTime",
        EncodingKind::Time,
        |p| Ok(FieldValue::optional(p.last_update)),
        |p, v| {
            p.last_update = Some(v.into_time("LastUpdateDateTime")?);
            Ok(())
        },
    ),
    Attribute::new(
        "Viewed",
        EncodingKind::Bool,
        |p: &Property| Ok(FieldValue::Bool(p.viewed)),
        |p: &mut Property, v| {
            p.viewed = v.into_bool("Viewed")?;
            Ok(())
        },
    )
    .transient(),
];

impl Entity for Property {
    const TYPE_NAME: &'static str = "Property";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn attributes() -> &'static [Attribute<Self>] {
        &PROPERTY_ATTRIBUTES
    }
}

/// Active, approved property updated at `2024-01-01T00:00:00Z + minute` minutes
pub fn property(id: &str, location: Location, price: i64, room_number: i64) -> Property {
    Property {
        id: id.to_string(),
        title: format!("{} rooms in {}", room_number, location.label()),
        location,
        price,
        room_number,
        is_active: true,
        is_approved: true,
        last_update: Some(updated_at(0)),
        viewed: false,
    }
}

/// Timestamp `minutes` after 2024-01-01T00:00:00Z
pub fn updated_at(minutes: i64) -> StoredTime {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    StoredTime::from_utc(base + chrono::Duration::minutes(minutes))
}

// ============================================================================
// Branches
// ============================================================================

pub const BRANCH_ALL: &str = "BRANCH_ALL";
pub const BRANCH_LOCATION: &str = "BRANCH_LOCATION";
pub const BRANCH_LOCATION_ROOMNUMBER: &str = "BRANCH_LOCATION_ROOMNUMBER";
pub const BRANCH_LOCATION_SORTBY_PRICE: &str = "BRANCH_LOCATION_SORTBY_PRICE";
pub const BRANCH_LOCATION_SORTBY_LASTUPDATEDATE: &str = "BRANCH_LOCATION_SORTBY_LASTUPDATEDATE";
pub const BRANCH_LOCATION_ROOMNUMBER_SORTBY_PRICE: &str = "BRANCH_LOCATION_ROOMNUMBER_SORTBY_PRICE";
pub const BRANCH_LOCATION_ROOMNUMBER_LASTUPDATEDATE: &str =
    "BRANCH_LOCATION_ROOMNUMBER_LASTUPDATEDATE";
pub const BRANCH_FAIROFFER: &str = "BRANCH_FAIROFFER";

fn listed(p: &Property) -> bool {
    p.is_active && p.is_approved
}

/// "Fair" when the price per room is within the city's threshold
pub fn is_offer_fair(p: &Property) -> String {
    let per_room = match p.location {
        Location::Istanbul => 500,
        Location::Berlin => 300,
        Location::London => 400,
    };
    if p.price <= p.room_number * per_room {
        "Fair".to_string()
    } else {
        "NotFair".to_string()
    }
}

fn branches() -> Result<Vec<Branch<Property>>> {
    Ok(vec![
        Branch::new(BRANCH_ALL)
            .filter_by(listed)
            .group_by_fn("All", |_: &Property| "All".to_string())?,
        Branch::new(BRANCH_LOCATION)
            .filter_by(listed)
            .group_by("Location")?,
        Branch::new(BRANCH_LOCATION_ROOMNUMBER)
            .filter_by(listed)
            .group_by("Location")?
            .group_by("RoomNumber")?,
        Branch::new(BRANCH_LOCATION_SORTBY_PRICE)
            .filter_by(listed)
            .group_by("Location")?
            .sort_by("Price")?,
        Branch::new(BRANCH_LOCATION_SORTBY_LASTUPDATEDATE)
            .filter_by(listed)
            .group_by("Location")?
            .sort_by("LastUpdateDateTime")?,
        Branch::new(BRANCH_LOCATION_ROOMNUMBER_SORTBY_PRICE)
            .filter_by(listed)
            .group_by("Location")?
            .group_by("RoomNumber")?
            .sort_by("Price")?,
        Branch::new(BRANCH_LOCATION_ROOMNUMBER_LASTUPDATEDATE)
            .filter_by(listed)
            .group_by("Location")?
            .group_by("RoomNumber")?
            .sort_by("LastUpdateDateTime")?,
        Branch::new(BRANCH_FAIROFFER)
            .filter_by(listed)
            .group_by_fn("FairOffer", is_offer_fair)?,
    ])
}

/// Property repository with every listing branch registered
pub fn property_repository(backend: Arc<dyn KeyValueBackend>) -> Repository<Property> {
    property_repository_with(backend, RepositoryConfig::default())
}

pub fn property_repository_with(
    backend: Arc<dyn KeyValueBackend>,
    config: RepositoryConfig,
) -> Repository<Property> {
    init_tracing();
    let mut repo = Repository::with_config(backend, config).expect("repository");
    for branch in branches().expect("branch definitions") {
        repo.add_branch(branch).expect("register branch");
    }
    repo
}

/// Ids of `entities`, in order
pub fn ids(entities: &[Property]) -> Vec<&str> {
    entities.iter().map(|p| p.id.as_str()).collect()
}
