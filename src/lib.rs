pub mod config;
pub mod logger;
pub mod error;
pub mod content;
pub mod image_resolver;
pub mod post_record;
pub mod post_index;
pub mod draft_list;
pub mod draft_processor;
pub mod text_utils;
pub mod util;
pub mod view;
mod test_data;
