mod tests_gc;
mod tests_picker;
