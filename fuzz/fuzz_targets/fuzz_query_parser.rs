#![no_main]

use libfuzzer_sys::fuzz_target;
use tabula::{Coordinate, SearchIndex};

fuzz_target!(|data: &str| {
    // Parsing must terminate and evaluation must not panic on any input
    let query = tabula::query::parse_query(data);

    let mut index = SearchIndex::new();
    let _ = index.add(Coordinate::new(0, 0), "fuzz (target) \"quoted\" | -dash");
    let _ = index.add(Coordinate::new(1, 2), data);
    index.flush();
    let _ = tabula::query::QueryExecutor::new(&index).execute(&query);
});
