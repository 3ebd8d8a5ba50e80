//! `#[serde(with = "serde_usize")]` for pointer fields: addresses are written
//! as plain integers, so layouts and allocation records can be dumped to JSON
//! and compared.

use std::{fmt, marker::PhantomData};

use serde::{de::Visitor, Deserializer, Serializer};

pub trait Address: Copy {
    fn to_address(self) -> usize;
    fn from_address(address: usize) -> Self;
}

impl<T> Address for *const T {
    fn to_address(self) -> usize {
        self as usize
    }

    fn from_address(address: usize) -> Self {
        address as Self
    }
}

pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Address,
{
    serializer.serialize_u64(value.to_address() as u64)
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Address,
{
    struct AddressVisitor<Ptr>(PhantomData<Ptr>);

    impl<'de, Ptr> Visitor<'de> for AddressVisitor<Ptr>
    where
        Ptr: Address,
    {
        type Value = Ptr;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an address")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let address = usize::try_from(v)
                .map_err(|_| E::custom(format_args!("address {v} does not fit in a usize")))?;
            Ok(Ptr::from_address(address))
        }
    }

    deserializer.deserialize_u64(AddressVisitor::<T>(PhantomData))
}
