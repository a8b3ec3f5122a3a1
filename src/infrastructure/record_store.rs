//! 外部记录存储 - 基础设施层
//!
//! 只描述"能查到什么"，不认识计分和排名

use crate::error::StoreResult;
use crate::models::{CohortKey, EvaluationRecord, StudentProfile, StudentRef};
use futures::future::BoxFuture;

/// 外部记录存储
///
/// 每次读取都可能挂起，调用方需要容忍单次调用失败
pub trait RecordStore: Send + Sync {
    /// 按某一种阶段写法查询已完成的作答记录
    fn list_completed_evaluations<'a>(
        &'a self,
        student_id: &'a str,
        phase_variant: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<EvaluationRecord>>>;

    /// 查询同机构、同校区、同年级的学生
    fn list_cohort_students<'a>(
        &'a self,
        cohort: &'a CohortKey,
        active_only: bool,
    ) -> BoxFuture<'a, StoreResult<Vec<StudentRef>>>;

    /// 查询学生档案
    fn get_student_profile<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<StudentProfile>>;

    /// 查询机构名称
    fn get_institution_name<'a>(
        &'a self,
        institution_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<String>>;
}
