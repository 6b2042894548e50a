pub mod actuator_controller;
pub mod actuator_link;
pub mod background_model;
pub mod blob;
pub mod blob_extractor;
pub mod frame;
pub mod motion_journal;
pub mod target_selector;
