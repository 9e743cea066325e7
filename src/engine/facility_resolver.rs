// ==========================================
// 血液配送收货系统 - 来源设施解析
// ==========================================
// 规则: 0 个候选 → 不挂设施，无需注册号
//       1 个候选 → 直接挂上
//       多个候选 → 必须补注册号，直到恰好匹配 1 个
// 红线: 多个候选时不得默认选第一个
// ==========================================

use crate::domain::batch::FacilityIdentification;

#[derive(Debug, Clone, PartialEq)]
pub enum FacilityResolution {
    /// 无候选
    Unidentified,
    Resolved(FacilityIdentification),
    /// 候选不唯一，需要注册号
    NeedsRegistrationNumber(Vec<FacilityIdentification>),
}

impl FacilityResolution {
    pub fn requires_registration_number(&self) -> bool {
        matches!(self, FacilityResolution::NeedsRegistrationNumber(_))
    }

    pub fn facility(&self) -> Option<&FacilityIdentification> {
        match self {
            FacilityResolution::Resolved(f) => Some(f),
            _ => None,
        }
    }
}

pub struct FacilityResolver;

impl FacilityResolver {
    /// 解析候选设施
    ///
    /// # 参数
    /// - candidates: 规则返回的候选列表
    /// - registration_number: 用户填写的注册号（可选）
    pub fn resolve(
        candidates: &[FacilityIdentification],
        registration_number: Option<&str>,
    ) -> FacilityResolution {
        match candidates {
            [] => FacilityResolution::Unidentified,
            [only] => FacilityResolution::Resolved(only.clone()),
            _ => {
                let registration_number = registration_number
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                if let Some(reg) = registration_number {
                    let mut matches = candidates.iter().filter(|c| {
                        c.registration_number
                            .as_deref()
                            .map_or(false, |r| r.trim().eq_ignore_ascii_case(reg))
                    });
                    if let (Some(found), None) = (matches.next(), matches.next()) {
                        return FacilityResolution::Resolved(found.clone());
                    }
                }
                FacilityResolution::NeedsRegistrationNumber(candidates.to_vec())
            }
        }
    }
}
