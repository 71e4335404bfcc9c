// Macro to generate a protocol-number newtype with named constants,
// a shadow enum for the strum machinery, and a kebab-case Display.
#[macro_export]
macro_rules! protocol_constants {
    (   $(#[$outer:meta])*
        $type_name:ident, $primitive:ty:
        $( $const_name:ident = $val:expr; )+
    ) => {
        paste::paste! {
            #[doc = concat!("A newtype wrapper around a ", stringify!($primitive), " protocol number.")]
            /// Provides named constants for well-known values and implements
            /// `Display` to show human-readable names.
            $(#[$outer])*
            #[repr(transparent)]
            #[derive(
                Clone,
                Copy,
                PartialEq,
                Eq,
                Hash,
                Debug,
                FromBytes,
                IntoBytes,
                Immutable,
                KnownLayout,
                Unaligned,
            )]
            pub struct $type_name(pub $primitive);

            impl $type_name {
                $(
                    pub const $const_name: $type_name = $type_name($val);
                )+

                pub fn is_named(&self) -> bool {
                    <[< $type_name Name >] as std::convert::TryFrom<$primitive>>::try_from(self.0).is_ok()
                }
            }

            // Shadow enum for the strum machinery
            #[derive(Debug, PartialEq, strum::EnumString, strum::IntoStaticStr, Clone, Copy)]
            #[strum(serialize_all = "kebab-case")]
            #[allow(non_camel_case_types)]
            enum [< $type_name Name >] {
                $(
                    $const_name,
                )+
            }

            impl TryFrom<$primitive> for [< $type_name Name >] {
                type Error = ();
                fn try_from(v: $primitive) -> Result<Self, Self::Error> {
                    match v {
                        $(
                            $val => Ok([< $type_name Name >]::$const_name),
                        )+
                        _ => Err(()),
                    }
                }
            }

            impl From<$primitive> for $type_name {
                fn from(v: $primitive) -> Self {
                    Self(v)
                }
            }

            impl From<$type_name> for $primitive {
                fn from(v: $type_name) -> Self {
                    v.0
                }
            }

            impl std::fmt::Display for $type_name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    if let Ok(proto_enum) = <[< $type_name Name >] as std::convert::TryFrom<$primitive>>::try_from(self.0) {
                        let s: &'static str = proto_enum.into();
                        f.write_str(s)
                    } else {
                        write!(f, "{}", self.0)
                    }
                }
            }
        }
    };
}
