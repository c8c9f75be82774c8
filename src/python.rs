use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::batch::{BatchItem, BatchRequest, ItemOutput, OutputFrame, OutputStream};
use crate::debug::{init_debug, DebugTarget};
use crate::error::Error;
use crate::request::{Body, Method, ReqwestExecutor};
use crate::utils::{duration_from_secs, py_to_json};

// Built on first use and shared by every call from Python.
static EXECUTOR: OnceCell<Arc<ReqwestExecutor>> = OnceCell::new();

impl From<Error> for PyErr {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidMethod(_)
            | Error::InvalidHttpVersion(_)
            | Error::InvalidUrl { .. }
            | Error::InvalidDelay(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[pyclass(name = "BatchItem")]
#[derive(Clone)]
pub struct PyBatchItem {
    #[pyo3(get, set)]
    pub url: String,
    #[pyo3(get, set)]
    pub method: String,
    #[pyo3(get, set)]
    pub headers: Option<HashMap<String, String>>,
    /// `str` is sent verbatim, anything else as JSON.
    #[pyo3(get, set)]
    pub body: Option<PyObject>,
    #[pyo3(get, set)]
    pub iterations: usize,
    #[pyo3(get, set)]
    pub delay: f64,
    /// Routes this item's frames to a dedicated output with this id.
    #[pyo3(get, set)]
    pub output_id: Option<String>,
}

#[pymethods]
impl PyBatchItem {
    #[new]
    #[pyo3(signature = (url, method=None, headers=None, body=None, iterations=1, delay=0.0, output_id=None))]
    fn new(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body: Option<PyObject>,
        iterations: usize,
        delay: f64,
        output_id: Option<String>,
    ) -> Self {
        Self {
            url,
            method: method.unwrap_or_else(|| Method::Get.to_string()),
            headers,
            body,
            iterations,
            delay,
            output_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "BatchItem(method={}, url={}, iterations={})",
            self.method, self.url, self.iterations
        )
    }
}

impl PyBatchItem {
    fn to_item(&self, py: Python<'_>) -> PyResult<(BatchItem, Option<OutputStream>)> {
        let method: Method = self.method.parse()?;
        let delay = duration_from_secs(self.delay)?;

        let mut item = BatchItem::new(method, self.url.clone(), self.headers.clone().unwrap_or_default())
            .with_iterations(self.iterations)
            .with_delay(delay);

        if let Some(body) = &self.body {
            item.set_body(py_to_body(py, body.as_ref(py))?);
        }

        let stream = match &self.output_id {
            Some(id) => {
                // Buffered for every iteration so nothing has to drain it during the run.
                let (output, rx) = ItemOutput::channel(id.clone(), item.iterations());
                item.set_output(output);
                Some(rx)
            }
            None => None,
        };
        Ok((item, stream))
    }
}

fn py_to_body(py: Python<'_>, obj: &PyAny) -> PyResult<Body> {
    if obj.is_none() {
        return Ok(Body::Empty);
    }
    if let Ok(text) = obj.extract::<String>() {
        return Ok(Body::Text(text));
    }
    Ok(Body::Json(py_to_json(py, obj)?))
}

/// Runs a batch and resolves to a list of frame dicts: shared-output frames
/// first, then each dedicated output in item order.
#[pyfunction]
pub fn fetch_batch<'py>(py: Python<'py>, items: Vec<PyBatchItem>) -> PyResult<&'py PyAny> {
    let mut batch_items = Vec::with_capacity(items.len());
    let mut streams = Vec::new();
    for py_item in &items {
        let (item, stream) = py_item.to_item(py)?;
        if let (Some(id), Some(rx)) = (py_item.output_id.clone(), stream) {
            streams.push((id, rx));
        }
        batch_items.push(item);
    }
    let executor = Arc::clone(EXECUTOR.get_or_try_init(|| ReqwestExecutor::new().map(Arc::new))?);

    pyo3_asyncio::tokio::future_into_py(py, async move {
        let mut batch = BatchRequest::new(batch_items, true);
        let shared = batch.take_output();
        batch.run_batch(executor).await?;

        let mut frames: Vec<(Option<String>, OutputFrame)> = Vec::new();
        if let Some(mut rx) = shared {
            while let Some(frame) = rx.recv().await {
                frames.push((None, frame));
            }
        }
        for (id, mut rx) in streams {
            while let Some(frame) = rx.recv().await {
                frames.push((Some(id.clone()), frame));
            }
        }

        let records: Vec<_> = frames
            .iter()
            .map(|(output_id, frame)| frame.record(output_id.as_deref()))
            .collect();
        let json = serde_json::to_string(&records).map_err(Error::from)?;

        Python::with_gil(|py| -> PyResult<PyObject> {
            Ok(py.import("json")?.call_method1("loads", (json,))?.into_py(py))
        })
    })
}

#[pyfunction]
#[pyo3(signature = (target=None))]
pub fn set_debug(target: Option<String>) -> PyResult<()> {
    init_debug(DebugTarget::parse(target.as_deref()))?;
    Ok(())
}

#[pymodule]
#[pyo3(name = "curling")]
fn curling_module(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyBatchItem>()?;
    m.add_function(wrap_pyfunction!(fetch_batch, m)?)?;
    m.add_function(wrap_pyfunction!(set_debug, m)?)?;
    Ok(())
}
