mod helpers;
mod tests_clean_destroy;
mod tests_recovery;
