//! Column type helpers.

/// Store a closed string enumeration in a `VARCHAR`/`TEXT` column.
///
/// The type must provide `fn as_str(&self) -> &'static str` and implement
/// `FromStr<Err = String>`; the database sees the plain text value.
///
/// ```ignore
/// database_layer::impl_text_enum!(UserStatus);
/// ```
#[macro_export]
macro_rules! impl_text_enum {
    ($ty:ty) => {
        impl $crate::sqlx::Type<$crate::sqlx::Postgres> for $ty {
            fn type_info() -> $crate::sqlx::postgres::PgTypeInfo {
                <&str as $crate::sqlx::Type<$crate::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &$crate::sqlx::postgres::PgTypeInfo) -> bool {
                <&str as $crate::sqlx::Type<$crate::sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> $crate::sqlx::Encode<'q, $crate::sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut $crate::sqlx::postgres::PgArgumentBuffer,
            ) -> $crate::sqlx::encode::IsNull {
                <&str as $crate::sqlx::Encode<'q, $crate::sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> $crate::sqlx::Decode<'r, $crate::sqlx::Postgres> for $ty {
            fn decode(
                value: $crate::sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, $crate::sqlx::error::BoxDynError> {
                let raw = <&str as $crate::sqlx::Decode<'r, $crate::sqlx::Postgres>>::decode(value)?;
                raw.parse::<$ty>().map_err(Into::into)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, PartialEq)]
    enum Shade {
        Light,
        Dark,
    }

    impl Shade {
        fn as_str(&self) -> &'static str {
            match self {
                Shade::Light => "light",
                Shade::Dark => "dark",
            }
        }
    }

    impl FromStr for Shade {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "light" => Ok(Shade::Light),
                "dark" => Ok(Shade::Dark),
                other => Err(format!("unknown shade '{}'", other)),
            }
        }
    }

    crate::impl_text_enum!(Shade);

    #[test]
    fn test_text_enum_uses_text_type_info() {
        use sqlx::{Postgres, Type, TypeInfo};
        assert_eq!(<Shade as Type<Postgres>>::type_info().name(), "TEXT");
        assert_eq!(Shade::Dark.as_str(), "dark");
        assert!("dim".parse::<Shade>().is_err());
        assert_eq!("light".parse::<Shade>(), Ok(Shade::Light));
    }
}
