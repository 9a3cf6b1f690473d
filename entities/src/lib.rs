pub mod account;
pub mod error;
pub mod group;
pub mod object;
pub mod permission;

pub use account::Account;
pub use error::{EntitiesError, Result};
pub use group::{Group, GroupType, EVERYONE_GROUP_UUID, PUBLIC_GROUP_UUID};
pub use object::{AuthObject, Entry, Folder, ObjectKind, Upload};
pub use permission::{AccessPermission, Grant, Subject, SubjectKind};
