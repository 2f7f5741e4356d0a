mod builder;
mod fixture;
mod joins;
mod scan;
mod sort_filter;
