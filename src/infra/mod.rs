pub mod superset;
