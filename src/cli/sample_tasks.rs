//! Ready-made tasks to try the agent with

/// Sample tasks, numbered from 1 in listings
pub const SAMPLE_TASKS: [&str; 5] = [
    "Search Google for the latest AI news",
    "Go to GitHub and find the most popular Python repositories",
    "Navigate to weather.com and get the forecast for New York",
    "Visit Amazon and search for 'laptop' then show me the first result",
    "Go to Wikipedia and find information about machine learning",
];

/// Sample task by its 1-based number
pub fn sample_task(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|index| SAMPLE_TASKS.get(index))
        .copied()
}

/// Numbered listing of the sample tasks
pub fn format_sample_tasks() -> String {
    SAMPLE_TASKS
        .iter()
        .enumerate()
        .map(|(i, task)| format!("  {}. {}", i + 1, task))
        .collect::<Vec<_>>()
        .join("\n")
}
