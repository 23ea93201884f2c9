//! `define_port_error!`: error enums for the driven ports.
//!
//! Every variant carries named fields. For each variant the macro emits a
//! snake-case constructor taking `impl Into<T>` per field and an `is_*`
//! predicate, so adapters can write `IdentityApiError::timeout(msg)` and
//! services can branch with `error.is_unauthorized()`.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),+ $(,)? } => $message:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field: $ty),+ },
            )+
        }

        ::paste::paste! {
            impl $name {
                $(
                    /// Build this variant from convertible field values.
                    pub fn [<$variant:snake>]($($field: impl Into<$ty>),+) -> Self {
                        Self::$variant { $($field: $field.into()),+ }
                    }

                    /// Whether the error is this variant.
                    pub const fn [<is_ $variant:snake>](&self) -> bool {
                        matches!(self, Self::$variant { .. })
                    }
                )+
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for the generated constructors and predicates.
    use rstest::rstest;

    define_port_error! {
        pub enum GatewayError {
            Refused { message: String } => "gateway refused: {message}",
            Rejected { status: u16, message: String } => "gateway rejected ({status}): {message}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = GatewayError::refused("no route");
        assert_eq!(err.to_string(), "gateway refused: no route");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = GatewayError::rejected(503_u16, "maintenance");
        assert_eq!(err.to_string(), "gateway rejected (503): maintenance");
    }

    #[rstest]
    #[case(GatewayError::refused("x"), true, false)]
    #[case(GatewayError::rejected(400_u16, "x"), false, true)]
    fn predicates_match_only_their_variant(
        #[case] err: GatewayError,
        #[case] refused: bool,
        #[case] rejected: bool,
    ) {
        assert_eq!(err.is_refused(), refused);
        assert_eq!(err.is_rejected(), rejected);
    }
}
