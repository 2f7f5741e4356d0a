mod generate;
mod properties;
mod test_utils;
