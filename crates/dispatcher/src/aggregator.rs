use std::sync::Arc;

use async_trait::async_trait;
use mailer_domain::{
    CounterUpdate, MailCounter, MailJob, MailJobRepository, MailJobStatus, OutcomeReporter,
    UnitOfWork, UnitOutcome,
};
use mailer_errors::{MailerError, MailerResult};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

/// 一次上报的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// 上报处理后读到的任务快照
    pub job: MailJob,
    /// 计数是否生效；为 false 表示迟到或重复的上报
    pub applied: bool,
    /// 本次上报是否触发了终态转换
    pub transitioned: bool,
}

impl RecordOutcome {
    pub fn is_late(&self) -> bool {
        !self.applied
    }
}

/// 汇总各发送单元的结果，并在全部上报后把任务推进到终态
///
/// 可以被任意数量的 worker 并发调用；计数递增与状态转换的原子性由仓储保证。
pub struct BatchAggregator {
    jobs: Arc<dyn MailJobRepository>,
}

impl BatchAggregator {
    pub fn new(jobs: Arc<dyn MailJobRepository>) -> Self {
        Self { jobs }
    }

    pub async fn record_success(&self, mail_job_id: i64) -> MailerResult<RecordOutcome> {
        self.record(mail_job_id, MailCounter::Sent).await
    }

    pub async fn record_failure(&self, mail_job_id: i64) -> MailerResult<RecordOutcome> {
        self.record(mail_job_id, MailCounter::Failed).await
    }

    #[instrument(skip(self))]
    async fn record(&self, mail_job_id: i64, counter: MailCounter) -> MailerResult<RecordOutcome> {
        let update = match self.jobs.increment_counter(mail_job_id, counter).await {
            Ok(update) => update,
            Err(e @ MailerError::MailJobNotFound { .. }) => {
                error!("收到不存在的邮件任务的上报: {}", e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let job = match update {
            CounterUpdate::Applied(job) => job,
            CounterUpdate::Rejected(job) => {
                counter!("mailer_late_reports_total").increment(1);
                warn!(
                    "迟到的上报已忽略: counter={:?}, 状态 {}, 已上报 {}/{}",
                    counter,
                    job.status,
                    job.reported_count(),
                    job.total_count
                );

                // 计数已满但仍在处理中：上一次终态转换没有成功，在这里补做
                if job.all_reported() && job.status == MailJobStatus::Processing {
                    let completed = self.complete(job).await?;
                    return Ok(RecordOutcome {
                        applied: false,
                        ..completed
                    });
                }

                return Ok(RecordOutcome {
                    job,
                    applied: false,
                    transitioned: false,
                });
            }
        };

        debug!(
            "计数已更新: sent={}, failed={}, total={}",
            job.sent_count, job.failed_count, job.total_count
        );

        if !job.all_reported() {
            return Ok(RecordOutcome {
                job,
                applied: true,
                transitioned: false,
            });
        }

        self.complete(job).await
    }

    /// 计数已满时尝试终态转换，只有一个调用者会成功
    async fn complete(&self, mut job: MailJob) -> MailerResult<RecordOutcome> {
        let target = MailJobStatus::terminal_for(job.failed_count);
        let transitioned = self
            .jobs
            .transition_status(job.id, MailJobStatus::Processing, target)
            .await?;

        if transitioned {
            job.update_status(target);
            counter!("mailer_jobs_finished_total", "status" => target.as_str()).increment(1);
            info!(
                "邮件任务 {} 已结束: 状态 {}, 成功 {}, 失败 {}",
                job.job_id, target, job.sent_count, job.failed_count
            );
        } else {
            debug!("邮件任务 {} 的终态已由其他上报设置", job.job_id);
        }

        Ok(RecordOutcome {
            job,
            applied: true,
            transitioned,
        })
    }
}

#[async_trait]
impl OutcomeReporter for BatchAggregator {
    async fn report(&self, unit: &UnitOfWork, outcome: &UnitOutcome) -> MailerResult<()> {
        match outcome {
            UnitOutcome::Succeeded { .. } => self.record_success(unit.mail_job_id).await?,
            UnitOutcome::Failed { .. } => self.record_failure(unit.mail_job_id).await?,
        };
        Ok(())
    }
}
