pub mod fs_helper;
pub mod os_helper;
