//! XML helpers shared by the EML readers.

mod utils;

pub use utils::{
    child_text, element_children, find_by_path, find_child, find_children, get_attribute,
    get_tag_name, get_text, read_xml_file,
};
