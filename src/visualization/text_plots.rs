use crate::metrics::TrainingMetrics;

/// Plot episode returns as ASCII art
pub fn plot_reward_history(metrics: &TrainingMetrics, width: usize, height: usize) -> String {
    if metrics.episode_rewards.is_empty() {
        return "No reward data available".to_string();
    }

    let rewards: Vec<f64> = metrics.episode_rewards.iter().copied().collect();
    plot_series(&rewards, "Episode Rewards", width, height)
}

/// Plot the max |ΔQ| measured at each check
pub fn plot_q_deltas(metrics: &TrainingMetrics, width: usize, height: usize) -> String {
    if metrics.q_deltas.is_empty() {
        return "No Q-delta data available".to_string();
    }

    let deltas: Vec<f64> = metrics.q_deltas.iter().copied().collect();
    plot_series(&deltas, "Max Q Change", width, height)
}

/// Generic series plotter
pub fn plot_series(values: &[f64], title: &str, width: usize, height: usize) -> String {
    if values.is_empty() || width < 10 || height < 5 {
        return format!("{}: Invalid data or dimensions", title);
    }

    let min_val = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max_val - min_val).abs() < f64::EPSILON {
        return format!("{}: All values are {:.4}", title, min_val);
    }

    let mut plot = vec![vec![' '; width]; height];

    for row in plot.iter_mut() {
        row[0] = '|';
    }
    for cell in plot[height - 1].iter_mut() {
        *cell = '-';
    }
    plot[height - 1][0] = '+';

    let x_scale = (values.len().max(2) - 1) as f64 / (width - 3) as f64;
    let y_scale = (height - 3) as f64 / (max_val - min_val);

    for (i, &value) in values.iter().enumerate() {
        let x = ((i as f64 / x_scale) as usize + 2).min(width - 1);
        let y = (height - 3).saturating_sub(((value - min_val) * y_scale) as usize).min(height - 2);
        plot[y][x] = '*';
    }

    let mut output = format!("{}\n", title);
    output.push_str(&format!("Max: {:.4}\n", max_val));
    for row in plot.iter() {
        output.push_str(&row.iter().collect::<String>());
        output.push('\n');
    }
    output.push_str(&format!("Min: {:.4}\n", min_val));
    output.push_str(&format!("Points: {}\n", values.len()));
    output
}

/// Create a summary table of metrics
pub fn metrics_summary(metrics: &TrainingMetrics) -> String {
    let mut output = String::new();
    output.push_str("Training Metrics Summary\n");
    output.push_str("========================\n");

    if !metrics.episode_rewards.is_empty() {
        let recent = metrics.episode_rewards.back().copied().unwrap_or(0.0);
        let avg = metrics.episode_rewards.iter().sum::<f64>() / metrics.episode_rewards.len() as f64;
        let max = metrics.episode_rewards.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        output.push_str(&format!(
            "Rewards: Current={:.2}, Average={:.2}, Max={:.2}\n",
            recent, avg, max
        ));
    }

    if !metrics.episode_lengths.is_empty() {
        let recent = metrics.episode_lengths.back().copied().unwrap_or(0);
        let avg = metrics.episode_lengths.iter().sum::<usize>() / metrics.episode_lengths.len();
        output.push_str(&format!("Episode Length: Current={}, Average={}\n", recent, avg));
    }

    if let Some(epsilon) = metrics.epsilons.back() {
        output.push_str(&format!("Epsilon: {:.4}\n", epsilon));
    }

    if let Some(delta) = metrics.q_deltas.back() {
        output.push_str(&format!("Max Q Change: {:.6} ({} checks)\n", delta, metrics.q_deltas.len()));
    }

    output
}
