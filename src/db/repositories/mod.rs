mod fitness_records;
mod summaries;
