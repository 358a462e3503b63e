//! CSV output for result tables, turnout tables, candidate lists and
//! results pages.

mod writer;

pub use writer::{
    save_outcome, save_page_results, write_candidate_list, write_page_results,
    write_result_table, write_station_table, CANDIDATE_LIST_FILE, STATIONS_SUFFIX,
};
