use std::convert::Infallible;

use agent_runtime::prelude::*;
use async_trait::async_trait;

struct Upper;

#[async_trait]
impl TaskHandler for Upper {
    type Task = BasicTask;
    type Output = String;
    type Error = Infallible;

    async fn process(&self, task: &BasicTask, _ctx: &TaskContext) -> Result<String, Infallible> {
        Ok(task.description().to_uppercase())
    }
}

#[tokio::test]
async fn prelude_is_enough_to_run_an_agent() {
    let identity = AgentIdentity::builder("upper").build().unwrap();
    let agent = AgentRuntime::new(identity, AgentConfig::default(), Upper);

    agent.start().await.unwrap();
    let output = agent.submit(BasicTask::new("shout")).await.unwrap();
    agent.stop().await.unwrap();

    assert_eq!(output, "SHOUT");
    assert_eq!(agent.state(), AgentState::Stopped);
    assert_eq!(agent.metrics().snapshot().succeeded(), 1);
}
