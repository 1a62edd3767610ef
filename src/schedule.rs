use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// 参数扫描表
///
/// control 值（γ）去重后升序排列，`secondaries[i]` 按文件顺序保存
/// `controls[i]` 对应的 secondary 值（1/β）。用有序列表代替以浮点数为键的映射。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    controls: Vec<f64>,
    secondaries: Vec<Vec<f64>>,
}

/// 保留 4 位小数，避免浮点键不一致
///
/// 按二进制值的精确十进制展开舍入，4.99625 实际略小于 4.99625，得到 4.9962。
fn round4(value: f64) -> f64 {
    format!("{:.4}", value).parse().unwrap_or(value)
}

impl Schedule {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    /// 解析 "control,secondary" 两列文本，跳过表头和空行
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let (Some(control), Some(secondary), None) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::Schedule {
                    line: line_no + 1,
                    message: format!("需要 2 列，实际为 '{}'", line),
                });
            };
            let parse = |s: &str| {
                s.trim().parse::<f64>().map(round4).map_err(|e| Error::Schedule {
                    line: line_no + 1,
                    message: format!("无法解析数值 '{}': {}", s.trim(), e),
                })
            };
            rows.push((parse(control)?, parse(secondary)?));
        }

        let mut controls: Vec<f64> = rows.iter().map(|(c, _)| *c).collect();
        controls.sort_by(f64::total_cmp);
        controls.dedup();

        let secondaries = controls
            .iter()
            .map(|control| {
                rows.iter()
                    .filter(|(c, _)| c == control)
                    .map(|(_, s)| *s)
                    .collect()
            })
            .collect();

        Ok(Self {
            controls,
            secondaries,
        })
    }

    pub fn controls(&self) -> &[f64] {
        &self.controls
    }

    pub fn secondaries(&self, control_index: usize) -> Result<&[f64]> {
        let index = Error::check_index("control", control_index, self.controls.len())?;
        Ok(&self.secondaries[index])
    }

    /// 按索引取 (control, secondary) 参数对
    pub fn pair(&self, control_index: usize, secondary_index: usize) -> Result<(f64, f64)> {
        let secondaries = self.secondaries(control_index)?;
        let index = Error::check_index("secondary", secondary_index, secondaries.len())?;
        Ok((self.controls[control_index], secondaries[index]))
    }

    /// 参数对总数
    pub fn len(&self) -> usize {
        self.secondaries.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_and_sorts_controls() {
        let text = "gamma,temp\n\
                    20.5,0.3\n\
                    20.5,0.1\n\
                    20.5,0.2\n\
                    3.0,0.05\n\
                    3.0,0.06\n\
                    3.0,0.07\n";
        let schedule = Schedule::parse(text).unwrap();
        assert_eq!(schedule.controls(), &[3.0, 20.5]);
        assert_eq!(schedule.secondaries(0).unwrap(), &[0.05, 0.06, 0.07]);
        assert_eq!(schedule.secondaries(1).unwrap(), &[0.3, 0.1, 0.2]);
        assert_eq!(schedule.len(), 6);
        assert_eq!(schedule.pair(1, 2).unwrap(), (20.5, 0.2));
    }

    #[test]
    fn rounds_before_dedup() {
        let text = "gamma,temp\n1.00001,0.5\n0.99999,0.6\n";
        let schedule = Schedule::parse(text).unwrap();
        assert_eq!(schedule.controls(), &[1.0]);
        assert_eq!(schedule.secondaries(0).unwrap(), &[0.5, 0.6]);
    }

    #[test]
    fn rounding_uses_exact_binary_value() {
        let schedule = Schedule::parse("gamma,temp\n4.99625,0.1\n2.00005,0.12345\n").unwrap();
        assert_eq!(schedule.controls(), &[2.0, 4.9962]);
        assert_eq!(schedule.secondaries(0).unwrap(), &[0.1235]);
        assert_eq!(round4(-1.23456), -1.2346);
    }

    #[test]
    fn malformed_row_reports_line() {
        let err = Schedule::parse("gamma,temp\n1.0,0.5\n1.0;0.6\n").unwrap_err();
        assert!(matches!(err, Error::Schedule { line: 3, .. }));

        let err = Schedule::parse("gamma,temp\nabc,0.5\n").unwrap_err();
        assert!(matches!(err, Error::Schedule { line: 2, .. }));
    }

    #[test]
    fn out_of_range_pair() {
        let schedule = Schedule::parse("gamma,temp\n1.0,0.5\n").unwrap();
        assert!(schedule.pair(1, 0).is_err());
        assert!(schedule.pair(0, 1).is_err());
    }
}
