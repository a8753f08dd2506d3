use crate::field::EnumDef;
use crate::value::{EnumValue, Value};

/// Declares a typed enumeration together with the [EnumDef] the converter uses
macro_rules! gtfs_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        #[derive(Derivative, Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $(#[$meta])*
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Codes and member names, as declared in the schema
            pub const DEF: EnumDef = EnumDef {
                name: stringify!($name),
                members: &[$(($code, stringify!($variant))),+],
            };

            /// Integer code written in the feed
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Member of a code, None if out of range
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Member of an enum value read by the converter
            pub fn from_value(value: &Value) -> Option<Self> {
                value
                    .as_enum()
                    .filter(|e| e.def.name == Self::DEF.name)
                    .and_then(|e| Self::from_code(e.code))
            }

            /// The typed value of this member
            pub fn value(self) -> Value {
                Value::Enum(EnumValue {
                    def: &Self::DEF,
                    code: self.code(),
                })
            }
        }
    };
}

gtfs_enum! {
    /// Whether a calendar date adds or removes service. See <https://gtfs.org/reference/static/#calendar_datestxt>
    pub enum ExceptionType {
        /// Service added for the date
        Add = 1,
        /// Service removed for the date
        Remove = 2,
    }
}

gtfs_enum! {
    /// Kind of connection between two trips. See <https://gtfs.org/reference/static/#transferstxt>
    #[derivative(Default(bound = ""))]
    pub enum TransferType {
        /// Recommended transfer point
        #[derivative(Default)]
        Recommended = 0,
        /// The departing vehicle waits for the arriving one
        Timed = 1,
        /// A minimum amount of time is required
        MinimumTime = 2,
        /// Transfers are not possible
        NotPossible = 3,
        /// Passengers stay onboard
        InSeat = 4,
        /// Same vehicle continues as another trip
        VehicleContinuation = 5,
    }
}

gtfs_enum! {
    /// How passengers board at a stop. See <https://gtfs.org/reference/static/#stop_timestxt>
    #[derivative(Default(bound = ""))]
    pub enum PickupType {
        /// Regularly scheduled pickup
        #[derivative(Default)]
        RegularlyScheduled = 0,
        /// No pickup available
        NoPickup = 1,
        /// Must phone agency to arrange pickup
        PhoneAgency = 2,
        /// Must coordinate with driver to arrange pickup
        CoordinateWithDriver = 3,
    }
}

gtfs_enum! {
    /// How passengers alight at a stop. See <https://gtfs.org/reference/static/#stop_timestxt>
    #[derivative(Default(bound = ""))]
    pub enum DropOffType {
        /// Regularly scheduled drop off
        #[derivative(Default)]
        RegularlyScheduled = 0,
        /// No drop off available
        NoDropOff = 1,
        /// Must phone agency to arrange drop off
        PhoneAgency = 2,
        /// Must coordinate with driver to arrange drop off
        CoordinateWithDriver = 3,
    }
}

impl TransferType {
    /// Do passengers stay in the same vehicle
    pub fn is_continuation(self) -> bool {
        matches!(self, TransferType::InSeat | TransferType::VehicleContinuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        assert_eq!(Some(TransferType::InSeat), TransferType::from_code(4));
        assert_eq!(None, TransferType::from_code(9));
        assert_eq!(2, ExceptionType::Remove.code());
        assert_eq!(
            Some(PickupType::PhoneAgency),
            PickupType::from_value(&PickupType::PhoneAgency.value())
        );
        assert_eq!(None, DropOffType::from_value(&PickupType::NoPickup.value()));
        assert_eq!(TransferType::Recommended, TransferType::default());
    }
}
