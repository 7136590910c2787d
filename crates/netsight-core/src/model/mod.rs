// ── Domain model ──
//
// Devices as the rest of the crate sees them: typed readings for the
// attributes the views use, the raw attribute map for everything else.

mod device;
mod mac;
mod reading;

pub use device::{Completeness, Device};
pub use mac::MacAddress;
pub use reading::Reading;
