pub mod locator_image_fetcher;
