pub mod xml_support;
