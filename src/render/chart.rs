use crate::models::WeightRecord;

/// ASCII area chart of a weight history ordered oldest first
pub fn area_chart(history: &[WeightRecord], width: usize, height: usize) -> String {
    if history.is_empty() {
        return "No weight records yet.".to_string();
    }
    let width = width.max(history.len().min(2)).max(1);
    let height = height.max(1);

    let weights: Vec<f64> = history.iter().map(|r| r.weight).collect();
    let mut min = weights.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut max = weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        min -= 0.5;
        max += 0.5;
    }
    let range = max - min;

    // each record gets an equal share of the columns
    let columns: Vec<f64> = (0..width)
        .map(|col| weights[col * weights.len() / width])
        .collect();

    let max_label = format!("{:.1}", max);
    let min_label = format!("{:.1}", min);
    let label_width = max_label.len().max(min_label.len());

    let mut lines = Vec::with_capacity(height + 2);
    for row in (0..height).rev() {
        let threshold = min + row as f64 / height as f64 * range;
        let label = if row == height - 1 {
            max_label.as_str()
        } else if row == 0 {
            min_label.as_str()
        } else {
            ""
        };
        let bar: String = columns
            .iter()
            .map(|w| if *w >= threshold { '#' } else { ' ' })
            .collect();
        lines.push(format!("{:>lw$} |{}", label, bar.trim_end(), lw = label_width));
    }
    lines.push(format!("{:>lw$} +{}", "", "-".repeat(width), lw = label_width));

    let first = history[0].date.to_string();
    let last = history[history.len() - 1].date.to_string();
    let axis = if history.len() > 1 && width > first.len() + last.len() {
        format!("{}{}{}", first, " ".repeat(width - first.len() - last.len()), last)
    } else {
        first
    };
    lines.push(format!("{:>lw$}  {}", "", axis, lw = label_width));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeightUnit;
    use chrono::NaiveDate;

    fn history(weights: &[f64]) -> Vec<WeightRecord> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightRecord {
                id: i.to_string(),
                pet_id: "c1".to_string(),
                weight: *w,
                unit: WeightUnit::Kg,
                date: NaiveDate::from_ymd_opt(2024, 8, i as u32 + 1).unwrap(),
                created_at: None,
            })
            .collect()
    }

    #[test]
    fn empty_history() {
        assert_eq!(area_chart(&[], 30, 5), "No weight records yet.");
    }

    #[test]
    fn rising_series_fills_right_side() {
        let chart = area_chart(&history(&[4.0, 5.0]), 30, 4);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("5.0 |"));
        // top row only covers the later record
        let top = lines[0].trim_start_matches("5.0 |");
        assert!(top.starts_with(' '));
        assert!(top.ends_with('#'));
        // bottom row covers everything
        assert_eq!(lines[3], format!("4.0 |{}", "#".repeat(30)));
        assert!(lines[5].contains("2024-08-01"));
        assert!(lines[5].ends_with("2024-08-02"));
    }

    #[test]
    fn flat_series_is_drawn() {
        let chart = area_chart(&history(&[5.0]), 10, 3);
        assert!(chart.contains("##########"));
    }
}
