mod tests_sinks;
