//! Entity fixture shared by the unit tests of this crate

use keybranch_core::{Attribute, EncodingKind, Entity, FieldValue, StoredTime};

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Listing {
    pub id: String,
    pub city: String,
    pub price: i64,
    pub rooms: i64,
    pub active: bool,
    pub listed: Option<StoredTime>,
}

static LISTING_ATTRIBUTES: [Attribute<Listing>; 6] = [
    Attribute::identifier(),
    Attribute::new(
        "City",
        EncodingKind::String,
        |l| Ok(FieldValue::from(l.city.as_str())),
        |l, v| {
            l.city = v.into_string("City")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Price",
        EncodingKind::Int,
        |l| Ok(FieldValue::Int(l.price)),
        |l, v| {
            l.price = v.into_i64("Price")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Rooms",
        EncodingKind::Int,
        |l| Ok(FieldValue::Int(l.rooms)),
        |l, v| {
            l.rooms = v.into_i64("Rooms")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Active",
        EncodingKind::Bool,
        |l| Ok(FieldValue::Bool(l.active)),
        |l, v| {
            l.active = v.into_bool("Active")?;
            Ok(())
        },
    ),
    Attribute::new(
        "Listed",
        EncodingKind::Time,
        |l| Ok(FieldValue::optional(l.listed)),
        |l, v| {
            l.listed = Some(v.into_time("Listed")?);
            Ok(())
        },
    ),
];

impl Entity for Listing {
    const TYPE_NAME: &'static str = "Listing";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn attributes() -> &'static [Attribute<Self>] {
        &LISTING_ATTRIBUTES
    }
}

pub(crate) fn listing(id: &str, city: &str, price: i64, rooms: i64) -> Listing {
    Listing {
        id: id.to_string(),
        city: city.to_string(),
        price,
        rooms,
        active: true,
        listed: None,
    }
}
