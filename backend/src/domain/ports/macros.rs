//! Generates port error enums with `thiserror` messages and snake-case
//! constructors that accept anything convertible into the field type.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor shape checks for generated port errors.
    define_port_error! {
        pub enum ProbeError {
            Unreachable => "backend unreachable",
            Refused { message: String } => "refused: {message}",
            Lagging { offset: u64 } => "lagging by {offset}",
            Partial { message: String, offset: u64 } => "partial write at {offset}: {message}",
        }
    }

    #[test]
    fn unit_variants_get_argumentless_constructors() {
        assert_eq!(ProbeError::unreachable(), ProbeError::Unreachable);
        assert_eq!(ProbeError::unreachable().to_string(), "backend unreachable");
    }

    #[test]
    fn string_fields_accept_str() {
        let err = ProbeError::refused("pool exhausted");
        assert_eq!(err.to_string(), "refused: pool exhausted");
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        assert_eq!(ProbeError::lagging(7_u64).to_string(), "lagging by 7");
        assert_eq!(
            ProbeError::partial("timeout", 1000_u64).to_string(),
            "partial write at 1000: timeout"
        );
    }
}
