use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::core::{enums::PoliticalStatus, error::AppError};

/// 专业简称 + 四位年级，例如 `土木2201`
pub static CLASS_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\u{4e00}-\u{9fa5}]+[0-9]{4}$").expect("Invalid Regex")
});

/// 班级为空时不校验
pub fn check_class_name(class_name: &str) -> Result<(), AppError> {
    if class_name.is_empty() || CLASS_NAME_REGEX.is_match(class_name) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "班级格式不正确，请使用标准格式（如：土木2201）".to_string(),
        ))
    }
}

/// 四个时间节点
#[derive(Debug, Clone, Default)]
pub struct MilestoneDates {
    pub join_league_date: Option<NaiveDate>,
    pub activist_date: Option<NaiveDate>,
    pub probationary_date: Option<NaiveDate>,
    pub formal_date: Option<NaiveDate>,
}

/// 等级 >= n 时第 n 个时间节点必填，缺哪个就报哪个
pub fn check_required_dates(status: PoliticalStatus, dates: &MilestoneDates) -> Result<(), AppError> {
    let rules: [(u8, bool, &str); 4] = [
        (1, dates.join_league_date.is_some(), "共青团员及以上需要填写入团时间"),
        (2, dates.activist_date.is_some(), "入党积极分子及以上需要填写成为积极分子时间"),
        (3, dates.probationary_date.is_some(), "预备党员及以上需要填写成为预备党员时间"),
        (4, dates.formal_date.is_some(), "党员需要填写成为正式党员时间"),
    ];

    for (min_rank, present, msg) in rules {
        if status.rank() >= min_rank && !present {
            return Err(AppError::BadRequest(msg.to_string()));
        }
    }
    Ok(())
}

/// 按年级搜索时只比较前两位（"2201" 与 "22级" 都匹配 22 级）
pub fn year_prefix(value: &str) -> String {
    value.chars().take(2).collect()
}
