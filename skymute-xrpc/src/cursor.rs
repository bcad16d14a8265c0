use std::future::Future;

/// One page of a cursor-paginated response.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page. Absent or empty means the listing is done.
    pub cursor: Option<String>,
}

/// Drives a cursor-paginated `fetch` to exhaustion, folding every page's
/// items into an accumulator.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's cursor afterwards. Pagination stops when a page carries no items
/// or no usable cursor; a fetch error aborts immediately with no partial
/// result.
pub async fn reduce_pages<T, R, E, F, Fut>(
    init: R,
    mut fetch: F,
    mut fold: impl FnMut(R, Vec<T>) -> R,
) -> Result<R, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut acc = init;
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.take()).await?;
        let exhausted = page.items.is_empty();
        acc = fold(acc, page.items);
        match page.cursor {
            Some(next) if !next.is_empty() && !exhausted => cursor = Some(next),
            _ => break,
        }
    }
    Ok(acc)
}

/// Collects the items of every page of a cursor-paginated `fetch` into one
/// vector. See [`reduce_pages`] for the pagination contract.
pub async fn collect_pages<T, E, F, Fut>(fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    reduce_pages(Vec::new(), fetch, |mut acc, items| {
        acc.extend(items);
        acc
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: &[u32], cursor: Option<&str>) -> Page<u32> {
        Page {
            items: items.to_vec(),
            cursor: cursor.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn collects_until_cursor_runs_out() {
        let pages = std::sync::Mutex::new(vec![
            page(&[1, 2], Some("a")),
            page(&[3], Some("b")),
            page(&[4], None),
        ]);
        let seen_cursors = std::sync::Mutex::new(Vec::new());

        let all: Vec<u32> = collect_pages(|cursor| {
            seen_cursors.lock().unwrap().push(cursor.clone());
            let next = pages.lock().unwrap().remove(0);
            async move { Ok::<_, ()>(next) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4]);
        assert_eq!(
            *seen_cursors.lock().unwrap(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_page_ends_pagination_despite_cursor() {
        let pages = std::sync::Mutex::new(vec![page(&[1], Some("a")), page(&[], Some("b"))]);

        let all: Vec<u32> = collect_pages(|_| {
            let next = pages.lock().unwrap().remove(0);
            async move { Ok::<_, ()>(next) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1]);
        assert!(pages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cursor_string_ends_pagination() {
        let pages = std::sync::Mutex::new(vec![page(&[1], Some(""))]);

        let all: Vec<u32> = collect_pages(|_| {
            let next = pages.lock().unwrap().remove(0);
            async move { Ok::<_, ()>(next) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1]);
    }

    #[tokio::test]
    async fn fetch_error_aborts() {
        let result: Result<Vec<u32>, &str> = collect_pages(|_| async { Err("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
