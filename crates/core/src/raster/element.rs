//! Cell value trait shared by continuous and categorical grids

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// No-data sentinel used by [`CategoricalMask`](crate::raster::CategoricalMask) cells.
///
/// Masks only ever hold 0 or 1, so any other byte is free to mark no-data.
pub const MASK_NODATA: u8 = u8::MAX;

/// Trait for types that can be stored in a raster cell.
///
/// Continuous layers (elevation, distance, indicators) use `f64`; categorical
/// layers (land cover, soil texture, masks) use the integer types.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// No-data value used when a grid has none declared
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, returning `None` when the value is not representable
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $nodata:expr) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nodata
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if !nd.is_nan() => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    _ => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

// Categorical products (ESA WorldCover, soil texture) reserve 0 or the type
// maximum for no-data; the maximum is used here so that 0 stays a valid class.
impl_raster_element_int!(u8, MASK_NODATA);
impl_raster_element_int!(u16, u16::MAX);
impl_raster_element_int!(i16, i16::MIN);
impl_raster_element_int!(i32, i32::MIN);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);
