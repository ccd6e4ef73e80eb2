/* Object model the generated accessors operate on */

pub mod class;
pub mod record;
pub mod value;

pub use class::{ClassError, ClassId, ClassInfo, ClassRegistry, SlotId, SlotInfo};
pub use record::{Instantiator, Object, ObjectRef, Record};
pub use value::Value;
