//! Callback-style adapters over [`PayloadClient`].
//!
//! For shells that want "fire and get called back" instead of awaiting.
//! Each `dispatch_*` spawns one task on the given runtime and invokes the
//! callback exactly once, on a runtime worker thread. Getting back onto a UI
//! thread (or any other context) is the callback's job.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::client::PayloadClient;
use super::wire::PayloadRequest;

/// A client bound to the runtime its calls are spawned on.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: PayloadClient,
    runtime: Handle,
}

impl Dispatcher {
    pub fn new(client: PayloadClient, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    /// Bind to the runtime of the calling context, if there is one.
    pub fn current(client: PayloadClient) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|runtime| Self::new(client, runtime))
    }

    /// `callback(reachable, message)`
    pub fn dispatch_test_connection<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(bool, String) + Send + 'static,
    {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let report = client.test_connection().await;
            callback(report.reachable(), report.message);
        })
    }

    pub fn dispatch_list_payloads<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            callback(client.list_payloads().await);
        })
    }

    pub fn dispatch_execute<F>(&self, request: PayloadRequest, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            callback(client.execute_payload(&request).await);
        })
    }

    pub fn dispatch_check_status<F>(&self, job_id: impl Into<String>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let client = self.client.clone();
        let job_id = job_id.into();
        self.runtime.spawn(async move {
            callback(client.check_status(&job_id).await);
        })
    }

    pub fn dispatch_payload_info<F>(&self, name: impl Into<String>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let client = self.client.clone();
        let name = name.into();
        self.runtime.spawn(async move {
            callback(client.get_payload_info(&name).await);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::tests::{client_for, dead_endpoint, demo_agent, spawn_agent};
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn current_requires_runtime() {
        let client = client_for("http://127.0.0.1:1");
        assert!(Dispatcher::current(client.clone()).is_some());

        let outside = std::thread::spawn(move || Dispatcher::current(client).is_none())
            .join()
            .unwrap();
        assert!(outside);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn every_callback_fires_exactly_once() {
        let base = spawn_agent(demo_agent()).await;
        let dispatcher = Dispatcher::current(client_for(&base)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let texts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        {
            let (calls, texts) = (calls.clone(), texts.clone());
            handles.push(dispatcher.dispatch_test_connection(move |ok, msg| {
                calls.fetch_add(1, Ordering::SeqCst);
                texts.lock().unwrap().push(format!("{ok} {msg}"));
            }));
        }
        {
            let (calls, texts) = (calls.clone(), texts.clone());
            handles.push(dispatcher.dispatch_list_payloads(move |t| {
                calls.fetch_add(1, Ordering::SeqCst);
                texts.lock().unwrap().push(t);
            }));
        }
        {
            let (calls, texts) = (calls.clone(), texts.clone());
            let req = PayloadRequest::new("ping", Map::new()).unwrap();
            handles.push(dispatcher.dispatch_execute(req, move |t| {
                calls.fetch_add(1, Ordering::SeqCst);
                texts.lock().unwrap().push(t);
            }));
        }
        {
            let (calls, texts) = (calls.clone(), texts.clone());
            handles.push(dispatcher.dispatch_check_status("job-42", move |t| {
                calls.fetch_add(1, Ordering::SeqCst);
                texts.lock().unwrap().push(t);
            }));
        }
        {
            let (calls, texts) = (calls.clone(), texts.clone());
            handles.push(dispatcher.dispatch_payload_info("echo", move |t| {
                calls.fetch_add(1, Ordering::SeqCst);
                texts.lock().unwrap().push(t);
            }));
        }

        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let joined = texts.lock().unwrap().join("\n");
        assert!(joined.contains("true ✅ Payload agent is running"));
        assert!(joined.contains("pong"));
        assert!(joined.contains("Name: echo"));
    }

    #[tokio::test]
    async fn failure_still_calls_back() {
        let dispatcher = Dispatcher::current(client_for(&dead_endpoint().await)).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        dispatcher.dispatch_test_connection(move |ok, msg| {
            let _ = tx.send((ok, msg));
        });
        let (ok, msg) = rx.await.unwrap();
        assert!(!ok);
        assert!(msg.contains("not reachable"));
    }
}
