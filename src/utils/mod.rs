pub mod richtext;
