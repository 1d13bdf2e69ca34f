mod tests_coercion;
mod tests_persistence;
